use ragui::cli::run_cli;

fn main() -> anyhow::Result<()> {
    run_cli()?;

    Ok(())
}
