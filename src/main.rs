//! md_drive CLI - Convert a Markdown file and upload it to Google Drive.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use md_drive::{
    extract_folder_id, upload_artifact, upload_path, ArtifactFormat, Authenticator, Document,
    DriveClient, FileCredentialStore, LoopbackFlow,
};

/// Convert a Markdown file to HTML or PDF and upload it to a Google Drive folder.
#[derive(Parser)]
#[command(name = "md_drive")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the Markdown file.
    markdown_file: PathBuf,

    /// Google Drive folder link (or bare folder ID) to upload into.
    drive_folder_link: String,

    /// Path to the OAuth client secrets (or service account) JSON file.
    #[arg(env = "GOOGLE_OAUTH_CLIENT_SECRETS", default_value = "credentials.json")]
    credentials: PathBuf,

    /// Output format.
    #[arg(long, short = 'f', value_enum, env = "MD_DRIVE_FORMAT", default_value = "html")]
    format: ArtifactFormat,

    /// Name of the uploaded file (defaults to output.html / output.pdf).
    #[arg(long, short = 'n')]
    name: Option<String>,

    /// Write the HTML next to the Markdown file and upload that file.
    #[arg(long)]
    save_html: bool,

    /// Token cache file.
    #[arg(long, env = "MD_DRIVE_TOKEN_CACHE", default_value = "token.json")]
    token_cache: PathBuf,

    /// Port for the OAuth redirect listener (0 picks a free port).
    #[arg(long, default_value_t = 0)]
    port: u16,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.save_html && cli.format != ArtifactFormat::Html {
        anyhow::bail!("--save-html only applies to --format html");
    }

    // Authenticate
    let auth = Authenticator::from_file(&cli.credentials)
        .with_context(|| format!("Failed to load credentials from {:?}", cli.credentials))?
        .with_store(FileCredentialStore::new(&cli.token_cache))
        .with_consent_flow(LoopbackFlow::new().with_port(cli.port));
    auth.access_token()
        .await
        .context("Failed to authenticate with Google Drive")?;

    // Convert
    let document = Document::read(&cli.markdown_file)
        .with_context(|| format!("Failed to read {:?}", cli.markdown_file))?;

    // Extract folder ID
    let folder_id = extract_folder_id(&cli.drive_folder_link)?;

    // Upload
    let client = DriveClient::new(auth);
    let uploaded = if cli.save_html {
        let html_path = document.write_sibling_html()?;
        println!("HTML written to {:?}", html_path);
        upload_path(&client, &html_path, &folder_id, cli.name.as_deref()).await
    } else {
        let artifact = document.render(cli.format);
        upload_artifact(&client, artifact, &folder_id, cli.name.as_deref()).await
    }
    .with_context(|| format!("Failed to upload to folder: {}", folder_id))?;

    match uploaded.web_view_link {
        Some(link) => println!(
            "File uploaded successfully. File ID: {} Web View Link: {}",
            uploaded.id, link
        ),
        None => println!("File uploaded successfully. File ID: {}", uploaded.id),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_positional_arguments() {
        let cli = Cli::parse_from([
            "md_drive",
            "doc.md",
            "https://drive.google.com/drive/folders/XYZ",
            "client_secret.json",
            "--format",
            "pdf",
        ]);
        assert_eq!(cli.markdown_file, PathBuf::from("doc.md"));
        assert_eq!(cli.credentials, PathBuf::from("client_secret.json"));
        assert_eq!(cli.format, ArtifactFormat::Pdf);
        assert!(!cli.save_html);
    }
}
