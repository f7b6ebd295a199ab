//! Command-line surface for `newsroom-cli`.

#![deny(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use newsroom::api_types::{Category, Role};
use newsroom::config::ConfigOverrides;

#[derive(Parser, Debug)]
#[command(name = "newsroom-cli", version, about = "Newsroom portal API CLI", long_about = None)]
pub struct Cli {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "NEWSROOM_CONFIG_FILE", value_name = "PATH", global = true)]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    /// Skip confirmation prompts for destructive commands.
    #[arg(long, short = 'y', global = true, default_value_t = false)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in, sign out and account management
    Auth(AuthArgs),
    /// Articles
    Posts(PostsArgs),
    /// User administration
    Users(UsersArgs),
    /// Comments
    Comments(CommentsArgs),
    /// Downloadable files
    Files(FilesArgs),
    /// Media host uploads
    Assets(AssetsArgs),
    /// Admin overview
    Dashboard,
}

/// Secret input: read from a file, or from the environment variable named on
/// the command. Never accepted as a plain flag.
#[derive(Args, Debug, Clone, Default)]
pub struct PasswordInput {
    /// Path to a file containing the password
    #[arg(long, value_name = "PATH")]
    pub password_file: Option<PathBuf>,

    #[arg(hide = true, long = "password-env", env = "NEWSROOM_PASSWORD")]
    pub password_env: Option<String>,
}

#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub action: AuthCmd,
}

#[derive(Subcommand, Debug)]
pub enum AuthCmd {
    /// Sign in with email and password
    SignIn {
        #[arg(long)]
        email: String,
        #[command(flatten)]
        password: PasswordInput,
    },
    /// Create an account
    SignUp {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[command(flatten)]
        password: PasswordInput,
        /// Profile picture to upload
        #[arg(long, value_name = "PATH")]
        avatar: Option<PathBuf>,
    },
    /// Complete a sign-in with a token from the OAuth redirect
    Oauth {
        /// Path to a file containing the access token
        #[arg(long, value_name = "PATH")]
        token_file: Option<PathBuf>,
        #[arg(hide = true, long = "token-env", env = "NEWSROOM_OAUTH_TOKEN")]
        token_env: Option<String>,
    },
    /// Show the signed-in user
    Whoami,
    /// Update the signed-in user's profile
    UpdateProfile {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[command(flatten)]
        password: PasswordInput,
        #[arg(long, value_name = "PATH")]
        avatar: Option<PathBuf>,
    },
    /// Sign out and forget the stored token
    SignOut,
    /// Delete the signed-in account
    DeleteAccount,
}

#[derive(Parser, Debug)]
pub struct PostsArgs {
    #[command(subcommand)]
    pub action: PostsCmd,
}

#[derive(Subcommand, Debug)]
pub enum PostsCmd {
    /// List articles, newest first
    List {
        /// Only articles by this author id
        #[arg(long, conflicts_with = "mine")]
        author: Option<String>,
        /// Only the signed-in user's articles
        #[arg(long, default_value_t = false)]
        mine: bool,
        #[arg(long)]
        category: Option<Category>,
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Show an article with its neighbours and comments
    Get { slug: String },
    /// Create an article
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        category: Category,
        #[arg(long)]
        body: Option<String>,
        #[arg(long)]
        body_file: Option<PathBuf>,
        /// Cover image to upload
        #[arg(long, value_name = "PATH", conflicts_with = "image_url")]
        image: Option<PathBuf>,
        /// Cover image already hosted elsewhere
        #[arg(long, value_name = "URL")]
        image_url: Option<String>,
        #[arg(long)]
        image_alt: Option<String>,
    },
    /// Edit an article
    Update {
        #[arg(long)]
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        body: Option<String>,
        #[arg(long)]
        body_file: Option<PathBuf>,
        /// Replacement cover image to upload
        #[arg(long, value_name = "PATH")]
        image: Option<PathBuf>,
        #[arg(long)]
        image_alt: Option<String>,
    },
    /// Delete an article
    Delete {
        #[arg(long)]
        id: String,
    },
}

#[derive(Parser, Debug)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub action: UsersCmd,
}

#[derive(Subcommand, Debug)]
pub enum UsersCmd {
    /// List users, newest first
    List {
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Change a user's role
    SetRole {
        #[arg(long)]
        id: String,
        #[arg(long)]
        role: Role,
    },
    /// Delete a user
    Delete {
        #[arg(long)]
        id: String,
    },
}

#[derive(Parser, Debug)]
pub struct CommentsArgs {
    #[command(subcommand)]
    pub action: CommentsCmd,
}

#[derive(Subcommand, Debug)]
pub enum CommentsCmd {
    /// List comments site-wide, or under one article
    List {
        /// Article slug
        #[arg(long)]
        post: Option<String>,
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Comment on an article
    Add {
        #[arg(long)]
        slug: String,
        #[arg(long)]
        content: String,
    },
    /// Delete a comment
    Delete {
        #[arg(long)]
        id: String,
    },
}

#[derive(Parser, Debug)]
pub struct FilesArgs {
    #[command(subcommand)]
    pub action: FilesCmd,
}

#[derive(Subcommand, Debug)]
pub enum FilesCmd {
    /// List files (admin view unless --published)
    List {
        #[arg(long, default_value_t = false)]
        published: bool,
    },
    /// Publish a downloadable file
    Publish {
        #[arg(long)]
        title: String,
        #[arg(long, value_name = "PATH")]
        file: PathBuf,
        #[arg(long, value_name = "PATH")]
        thumbnail: PathBuf,
    },
    /// Delete a file
    Delete {
        #[arg(long)]
        id: String,
    },
    /// Download a file, named after its title
    Download {
        #[arg(long)]
        id: String,
        /// Look the id up in the public listing
        #[arg(long, default_value_t = false)]
        published: bool,
        /// Target file, or a directory to save into (default: current directory)
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
}

#[derive(Parser, Debug)]
pub struct AssetsArgs {
    #[command(subcommand)]
    pub action: AssetsCmd,
}

#[derive(Subcommand, Debug)]
pub enum AssetsCmd {
    /// Upload a file to the media host and print its public URL
    Upload { file: PathBuf },
}
