use anyhow::Result;

fn main() -> Result<()> {
    rdfdriver_cli::run()
}
