use super::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "ballot-auth", about = "Issue, validate and revoke ballot auth tokens")]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Issue a token pair, rotating away `--previous` if given.
    Issue {
        #[arg(long)]
        uid: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        previous: Option<String>,
    },
    ValidateId {
        token: String,
    },
    ValidateRefresh {
        token: String,
        /// Also require a live revocation record.
        #[arg(long)]
        check_store: bool,
    },
    /// Revoke every refresh token of a user.
    SignOut {
        #[arg(long)]
        uid: String,
    },
}
