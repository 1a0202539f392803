fn main() -> Result<(), Box<dyn std::error::Error>> {
    rollsync::entry::run_app()
}
