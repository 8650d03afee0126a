use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    covid19_hub::example_apps::run_panel_demo(
        std::env::args().skip(1),
        covid19_hub::example_apps::directory_hub,
    )
}
