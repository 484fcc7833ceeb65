use anyhow::Result;

fn main() -> Result<()> {
    shoal::run()?;
    Ok(())
}
