use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{self, Cursor, ErrorKind, Read};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tauri_plugin_content_picker::{
    decode_paths, Callback, CallbackSink, CollisionPolicy, ContentHandle, ContentResolver,
    MimeFilter, PickOutcome, PickRequest, PickerConfig, PickerCore, PickerInvocation,
    PickerOptions, PickerPlatform, RawPickerResult, ResultSender,
};
use tempfile::TempDir;

enum Script {
    Respond(RawPickerResult),
    Unavailable(&'static str),
    Hold,
    DropReply,
}

struct FakePlatform {
    script: Script,
    invocations: Mutex<Vec<PickerInvocation>>,
    held: Mutex<Option<ResultSender>>,
}

impl FakePlatform {
    fn new(script: Script) -> Self {
        Self {
            script,
            invocations: Mutex::new(Vec::new()),
            held: Mutex::new(None),
        }
    }

    fn responding(result: RawPickerResult) -> Self {
        Self::new(Script::Respond(result))
    }

    fn is_holding(&self) -> bool {
        self.held.lock().unwrap().is_some()
    }

    fn release(&self, result: RawPickerResult) {
        let reply = self.held.lock().unwrap().take().expect("no held reply");
        assert!(reply.deliver(result));
    }

    fn last_invocation(&self) -> PickerInvocation {
        self.invocations.lock().unwrap().last().cloned().expect("picker never shown")
    }
}

impl PickerPlatform for FakePlatform {
    fn present(
        &self,
        invocation: &PickerInvocation,
        reply: ResultSender,
    ) -> tauri_plugin_content_picker::Result<()> {
        self.invocations.lock().unwrap().push(invocation.clone());
        match &self.script {
            Script::Respond(result) => {
                reply.deliver(result.clone());
            }
            Script::Unavailable(reason) => {
                return Err(tauri_plugin_content_picker::Error::LaunchFailure(
                    reason.to_string(),
                ))
            }
            Script::Hold => *self.held.lock().unwrap() = Some(reply),
            Script::DropReply => drop(reply),
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeResolver {
    items: HashMap<String, (Option<String>, Vec<u8>)>,
    broken: HashSet<String>,
    opened: Mutex<Vec<String>>,
}

/// Yields nothing but an error, as when a provider disappears mid-read.
struct Interrupted;

impl Read for Interrupted {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(ErrorKind::BrokenPipe, "provider went away"))
    }
}

impl FakeResolver {
    fn item(mut self, id: &str, name: &str, bytes: &[u8]) -> Self {
        self.items
            .insert(id.to_string(), (Some(name.to_string()), bytes.to_vec()));
        self
    }

    /// Serves `bytes` and then fails before the end of the stream.
    fn broken_item(mut self, id: &str, name: &str, bytes: &[u8]) -> Self {
        self.broken.insert(id.to_string());
        self.item(id, name, bytes)
    }

    fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl ContentResolver for FakeResolver {
    fn display_name(&self, handle: &ContentHandle) -> io::Result<Option<String>> {
        Ok(self
            .items
            .get(handle.as_str())
            .and_then(|(name, _)| name.clone()))
    }

    fn open(&self, handle: &ContentHandle) -> io::Result<Box<dyn Read + Send>> {
        self.opened.lock().unwrap().push(handle.to_string());
        let (_, bytes) = self
            .items
            .get(handle.as_str())
            .ok_or_else(|| io::Error::new(ErrorKind::PermissionDenied, "permission revoked"))?;
        let stream = Cursor::new(bytes.clone());
        if self.broken.contains(handle.as_str()) {
            return Ok(Box::new(stream.chain(Interrupted)));
        }
        Ok(Box::new(stream))
    }
}

#[derive(Default)]
struct RecordingSink {
    delivered: Mutex<Vec<(String, Callback)>>,
}

impl RecordingSink {
    fn delivered(&self) -> Vec<(String, Callback)> {
        self.delivered.lock().unwrap().clone()
    }
}

impl CallbackSink for RecordingSink {
    fn deliver(&self, target: &str, callback: &Callback) -> tauri_plugin_content_picker::Result<()> {
        self.delivered
            .lock()
            .unwrap()
            .push((target.to_string(), callback.clone()));
        Ok(())
    }
}

fn handles(ids: &[&str]) -> Vec<ContentHandle> {
    ids.iter().map(|id| ContentHandle::new(*id)).collect()
}

fn cache_entries(dir: &Path) -> usize {
    fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn cancellation_emits_one_cancel_and_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let core = PickerCore::new(PickerConfig::default(), dir.path().join("cache"));
    let platform = FakePlatform::responding(RawPickerResult::cancelled());
    let resolver = FakeResolver::default();
    let sink = RecordingSink::default();

    let outcome = core
        .pick(PickRequest::new("main"), &platform, &resolver, &sink)
        .await;

    assert_eq!(outcome, PickOutcome::Cancelled);
    assert_eq!(
        sink.delivered(),
        vec![("main".to_string(), Callback::PickerCancelled)]
    );
    assert!(resolver.opened().is_empty());
    assert_eq!(cache_entries(&dir.path().join("cache")), 0);
    assert!(!core.is_active());
}

#[tokio::test]
async fn single_png_lands_in_cache() {
    let dir = TempDir::new().unwrap();
    let core = PickerCore::new(PickerConfig::default(), dir.path());
    let payload = vec![0x89u8; 100];
    let platform = FakePlatform::responding(RawPickerResult::single(ContentHandle::new(
        "content://media/external/images/42",
    )));
    let resolver =
        FakeResolver::default().item("content://media/external/images/42", "photo.png", &payload);
    let sink = RecordingSink::default();

    let request = PickRequest::new("main").mime_types(["image/png"]);
    let outcome = core.pick(request, &platform, &resolver, &sink).await;

    let expected = dir.path().join("photo.png");
    assert_eq!(
        sink.delivered(),
        vec![("main".to_string(), Callback::FilePicked(path_text(&expected)))]
    );
    assert_eq!(outcome.paths(), vec![expected.clone()]);
    assert_eq!(fs::metadata(&expected).unwrap().len(), 100);
    assert_eq!(fs::read(&expected).unwrap(), payload);

    let invocation = platform.last_invocation();
    assert_eq!(invocation.filter, MimeFilter::Exact("image/png".into()));
    assert!(!invocation.allow_multiple);
    assert_eq!(invocation.title, "Select File");
}

#[tokio::test]
async fn multi_select_drops_unreadable_item() {
    let dir = TempDir::new().unwrap();
    let core = PickerCore::new(PickerConfig::default(), dir.path());
    let platform = FakePlatform::responding(RawPickerResult::multiple(handles(&[
        "content://docs/1",
        "content://docs/2",
        "content://docs/3",
    ])));
    let resolver = FakeResolver::default()
        .item("content://docs/1", "a.txt", b"first")
        .item("content://docs/3", "c.txt", b"third");
    let sink = RecordingSink::default();

    let outcome = core
        .pick(
            PickRequest::new("main").allow_multiple(true),
            &platform,
            &resolver,
            &sink,
        )
        .await;

    let joined = format!(
        "{}|{}",
        path_text(&dir.path().join("a.txt")),
        path_text(&dir.path().join("c.txt"))
    );
    assert_eq!(
        sink.delivered(),
        vec![("main".to_string(), Callback::MultipleFilesPicked(joined))]
    );
    assert!(matches!(outcome, PickOutcome::SuccessMultiple { ref files } if files.len() == 2));
    assert_eq!(platform.last_invocation().filter, MimeFilter::Any);
}

#[tokio::test]
async fn multi_select_keeps_platform_order() {
    let dir = TempDir::new().unwrap();
    let core = PickerCore::new(PickerConfig::default(), dir.path());
    let ids = ["content://d/9", "content://d/2", "content://d/5", "content://d/1"];
    let platform = FakePlatform::responding(RawPickerResult::multiple(handles(&ids)));
    let resolver = ids
        .iter()
        .enumerate()
        .fold(FakeResolver::default(), |resolver, (index, id)| {
            resolver.item(id, &format!("file{index}.bin"), &[index as u8; 4])
        });
    let sink = RecordingSink::default();

    core.pick(
        PickRequest::new("main")
            .allow_multiple(true)
            .mime_types(["image/png", "application/pdf"]),
        &platform,
        &resolver,
        &sink,
    )
    .await;

    let delivered = sink.delivered();
    assert_eq!(delivered.len(), 1);
    let Callback::MultipleFilesPicked(payload) = &delivered[0].1 else {
        panic!("unexpected callback {:?}", delivered[0].1);
    };
    let expected: Vec<_> = (0..ids.len())
        .map(|index| dir.path().join(format!("file{index}.bin")))
        .collect();
    assert_eq!(decode_paths(payload), expected);
    assert_eq!(resolver.opened(), ids);
    assert_eq!(
        platform.last_invocation().filter,
        MimeFilter::Set(vec!["image/png".into(), "application/pdf".into()])
    );
}

#[tokio::test]
async fn every_item_failing_is_reported_as_error() {
    let dir = TempDir::new().unwrap();
    let core = PickerCore::new(PickerConfig::default(), dir.path());
    let platform = FakePlatform::responding(RawPickerResult::multiple(handles(&[
        "content://gone/1",
        "content://gone/2",
    ])));
    let resolver = FakeResolver::default();
    let sink = RecordingSink::default();

    let outcome = core
        .pick(
            PickRequest::new("main").allow_multiple(true),
            &platform,
            &resolver,
            &sink,
        )
        .await;

    assert_eq!(
        sink.delivered(),
        vec![(
            "main".to_string(),
            Callback::PickerError("Failed to copy selected files".into())
        )]
    );
    assert!(!outcome.is_success());
    assert_eq!(resolver.opened().len(), 2);
}

#[tokio::test]
async fn failed_duplicate_keeps_earlier_copy_on_disk() {
    let dir = TempDir::new().unwrap();
    let core = PickerCore::new(PickerConfig::default(), dir.path());
    let platform = FakePlatform::responding(RawPickerResult::multiple(handles(&[
        "content://media/1",
        "content://media/2",
    ])));
    let resolver = FakeResolver::default()
        .item("content://media/1", "image.jpg", b"first image")
        .broken_item("content://media/2", "image.jpg", &[0xffu8; 32]);
    let sink = RecordingSink::default();

    core.pick(
        PickRequest::new("main").allow_multiple(true),
        &platform,
        &resolver,
        &sink,
    )
    .await;

    let expected = dir.path().join("image.jpg");
    assert_eq!(
        sink.delivered(),
        vec![(
            "main".to_string(),
            Callback::MultipleFilesPicked(path_text(&expected))
        )]
    );
    assert_eq!(fs::read(&expected).unwrap(), b"first image");
    assert_eq!(cache_entries(dir.path()), 1);
}

#[tokio::test]
async fn single_select_processes_only_first_handle() {
    let dir = TempDir::new().unwrap();
    let core = PickerCore::new(PickerConfig::default(), dir.path());
    let platform = FakePlatform::responding(RawPickerResult::multiple(handles(&[
        "content://x/1",
        "content://x/2",
    ])));
    let resolver = FakeResolver::default()
        .item("content://x/1", "one.txt", b"1")
        .item("content://x/2", "two.txt", b"2");
    let sink = RecordingSink::default();

    core.pick(PickRequest::new("main"), &platform, &resolver, &sink)
        .await;

    assert_eq!(resolver.opened(), vec!["content://x/1"]);
    assert_eq!(
        sink.delivered()[0].1,
        Callback::FilePicked(path_text(&dir.path().join("one.txt")))
    );
    assert!(!dir.path().join("two.txt").exists());
}

#[tokio::test]
async fn unavailable_picker_fails_immediately() {
    let dir = TempDir::new().unwrap();
    let core = PickerCore::new(PickerConfig::default(), dir.path());
    let platform = FakePlatform::new(Script::Unavailable("no document provider"));
    let resolver = FakeResolver::default();
    let sink = RecordingSink::default();

    let outcome = core
        .pick(PickRequest::new("main"), &platform, &resolver, &sink)
        .await;

    assert_eq!(
        outcome,
        PickOutcome::Error {
            message: "Failed to open file picker: no document provider".into()
        }
    );
    assert_eq!(sink.delivered().len(), 1);
    assert_eq!(sink.delivered()[0].1.method_name(), "OnPickerError");
    assert!(!core.is_active());
}

#[tokio::test]
async fn dropped_reply_ends_request_with_error() {
    let dir = TempDir::new().unwrap();
    let core = PickerCore::new(PickerConfig::default(), dir.path());
    let platform = FakePlatform::new(Script::DropReply);
    let resolver = FakeResolver::default();
    let sink = RecordingSink::default();

    core.pick(PickRequest::new("main"), &platform, &resolver, &sink)
        .await;

    assert_eq!(
        sink.delivered(),
        vec![(
            "main".to_string(),
            Callback::PickerError("Picker closed without delivering a result".into())
        )]
    );
}

#[tokio::test]
async fn second_launch_is_rejected_while_first_is_pending() {
    let dir = TempDir::new().unwrap();
    let core = Arc::new(PickerCore::new(PickerConfig::default(), dir.path()));
    let platform = Arc::new(FakePlatform::new(Script::Hold));
    let resolver = Arc::new(FakeResolver::default());
    let sink = Arc::new(RecordingSink::default());

    let first = tokio::spawn({
        let (core, platform, resolver, sink) = (
            Arc::clone(&core),
            Arc::clone(&platform),
            Arc::clone(&resolver),
            Arc::clone(&sink),
        );
        async move {
            core.pick(
                PickRequest::new("first"),
                platform.as_ref(),
                resolver.as_ref(),
                sink.as_ref(),
            )
            .await
        }
    });

    while !platform.is_holding() {
        tokio::task::yield_now().await;
    }
    assert!(core.is_active());

    let second = core
        .pick(
            PickRequest::new("second"),
            platform.as_ref(),
            resolver.as_ref(),
            sink.as_ref(),
        )
        .await;
    assert_eq!(
        second,
        PickOutcome::Error {
            message: "Picker is already active".into()
        }
    );
    assert_eq!(platform.invocations.lock().unwrap().len(), 1);

    platform.release(RawPickerResult::cancelled());
    assert_eq!(first.await.unwrap(), PickOutcome::Cancelled);
    assert!(!core.is_active());

    assert_eq!(
        sink.delivered(),
        vec![
            (
                "second".to_string(),
                Callback::PickerError("Picker is already active".into())
            ),
            ("first".to_string(), Callback::PickerCancelled),
        ]
    );
}

#[tokio::test]
async fn picking_same_item_twice_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let core = PickerCore::new(PickerConfig::default(), dir.path());
    let platform =
        FakePlatform::responding(RawPickerResult::single(ContentHandle::new("content://x/7")));
    let resolver = FakeResolver::default().item("content://x/7", "model.stl", b"solid cube");
    let sink = RecordingSink::default();

    let first = core
        .pick(PickRequest::new("main"), &platform, &resolver, &sink)
        .await;
    let second = core
        .pick(PickRequest::new("main"), &platform, &resolver, &sink)
        .await;

    assert_eq!(first.paths(), second.paths());
    assert_eq!(fs::read(&second.paths()[0]).unwrap(), b"solid cube");
    assert_eq!(cache_entries(dir.path()), 1);
}

#[tokio::test]
async fn options_route_into_folder_and_disambiguate() {
    let dir = TempDir::new().unwrap();
    let config = PickerConfig {
        destination_folder: Some("picked".into()),
        ..PickerConfig::default()
    };
    let core = PickerCore::new(config, dir.path());
    let platform =
        FakePlatform::responding(RawPickerResult::single(ContentHandle::new("content://x/7")));
    let resolver = FakeResolver::default().item("content://x/7", "cat.png", b"meow");
    let sink = RecordingSink::default();

    let mut options = PickerOptions::for_images();
    options.collision_policy = CollisionPolicy::Disambiguate;

    for _ in 0..2 {
        core.pick(
            PickRequest::from_options("gallery", &options, false),
            &platform,
            &resolver,
            &sink,
        )
        .await;
    }

    let images = dir.path().join("Images");
    assert!(images.join("cat.png").exists());
    assert!(images.join("cat_1.png").exists());
    assert!(!dir.path().join("picked").exists());
    assert_eq!(platform.last_invocation().title, "Select Image");
    assert_eq!(
        platform.last_invocation().filter.extensions(),
        vec!["png", "jpg", "jpeg", "gif", "bmp"]
    );
}
