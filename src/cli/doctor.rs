use anyhow::Result;

pub async fn run() -> Result<()> {
    println!("🔍 Checking prism installation...");

    // TODO: Check installation health
    // - Model paths
    // - Database integrity
    // - Dependencies

    println!("✅ All checks passed!");
    Ok(())
}
