use anyhow::Result;
use mintfiat::cli::start;

// Main function
#[tokio::main]
async fn main() -> Result<()> {
    // Start the program
    let (globals, action) = start()?;

    // Handle the action
    action.execute(&globals).await
}
