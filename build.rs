const COMMANDS: &[&str] = &["pick", "pick_async", "is_active"];

fn main() {
    tauri_plugin::Builder::new(COMMANDS)
        .android_path("android")
        .build()
}
