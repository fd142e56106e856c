use crate::cli::globals::GlobalArgs;
use crate::gateway::Currency;

// Internal "interpreter" for `Action`.
// We keep the match in a separate module so `mod.rs` stays small as more actions are added.
mod run;

#[derive(Debug)]
pub enum Action {
    Signup {
        email: String,
        referral: Option<String>,
    },
    Login {
        email: String,
    },
    Send {
        email: String,
        recipient: String,
        currency: Currency,
        amount: f64,
    },
    ChangePassword {
        email: String,
    },
}

impl Action {
    // Convenience wrapper so call sites can do `action.execute(&globals).await`.
    // When adding new actions, extend the match in `run::execute`.
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self, globals: &GlobalArgs) -> anyhow::Result<()> {
        run::execute(globals, self).await
    }
}
