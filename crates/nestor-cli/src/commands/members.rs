//! members command - every member of a group, nested members included

use super::CommandContext;
use anyhow::{bail, Result};
use nestor_ldap::SearchMembers;
use serde::Serialize;

#[derive(Serialize)]
struct MembersResult {
    group: String,
    strategy: &'static str,
    members: Vec<String>,
}

pub async fn execute(ctx: &CommandContext, name: &str) -> Result<()> {
    let mut group = None;
    for domain in ctx.session.search_domains() {
        if let Some(found) = domain.groups(std::slice::from_ref(&name)).await?.into_iter().next() {
            group = Some(found);
            break;
        }
    }
    let Some(group) = group else {
        bail!("no group {} in any search domain", name);
    };

    let search = ctx.session.member_search().await;
    let members = search.perform(&group).await?;

    let result = MembersResult {
        group: group.dn().to_string(),
        strategy: search.kind().as_str(),
        members: members.iter().map(|m| m.dn().to_string()).collect(),
    };

    if ctx.is_json() {
        return ctx.print_json(&result);
    }

    println!("{} ({}, {} members)", result.group, result.strategy, result.members.len());
    for dn in &result.members {
        println!("  {}", dn);
    }

    Ok(())
}
