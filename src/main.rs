fn main() -> anyhow::Result<()> {
    repctl::logging::init();
    repctl::cli::run()
}
