//! test-connection and capabilities commands

use super::{print_entry, CommandContext, EntryView};
use anyhow::{bail, Result};
use serde::Serialize;

#[derive(Serialize)]
struct CapabilitiesResult {
    server: String,
    active_directory_capable: bool,
    membership_validator: &'static str,
    member_search_strategy: &'static str,
    root_dse: EntryView,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn test_connection(ctx: &CommandContext) -> Result<()> {
    let url = ctx.session.connection_options().url();

    if !ctx.session.test_connection().await? {
        bail!("service account bind rejected by {}", url);
    }

    if ctx.is_json() {
        ctx.print_json(&serde_json::json!({ "server": url, "bound": true }))
    } else {
        println!("Bound to {} as {}", url, ctx.session.connection_options().admin_user);
        Ok(())
    }
}

pub async fn capabilities(ctx: &CommandContext) -> Result<()> {
    let session = &ctx.session;
    let root_dse = session.search_root_dse().await;

    let result = CapabilitiesResult {
        server: session.connection_options().url(),
        active_directory_capable: session.active_directory_capable().await,
        membership_validator: session.validator_kind().await.as_str(),
        member_search_strategy: session.member_search_kind().await.as_str(),
        root_dse: EntryView::from(&root_dse),
        error: session.capabilities().last_error(),
    };

    if ctx.is_json() {
        return ctx.print_json(&result);
    }

    println!("Server:                 {}", result.server);
    println!("ActiveDirectory:        {}", result.active_directory_capable);
    println!("Membership validator:   {}", result.membership_validator);
    println!("Member search strategy: {}", result.member_search_strategy);
    if let Some(error) = &result.error {
        println!("Root DSE unavailable:   {}", error);
    }
    println!();
    print_entry(&root_dse);

    Ok(())
}
