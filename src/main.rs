mod cli;

fn main() -> anyhow::Result<()> {
    storydeck::logging::init();
    cli::run()
}
