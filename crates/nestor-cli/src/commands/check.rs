//! check command - membership of a user in a set of groups

use super::CommandContext;
use anyhow::{bail, Result};
use nestor_ldap::ValidateMembership;
use serde::Serialize;

#[derive(Serialize)]
struct CheckResult {
    user: String,
    is_member: bool,
    strategy: &'static str,
    /// Candidate groups the strategy matched, when it reports them
    matched: Vec<String>,
    candidates: Vec<String>,
}

pub async fn execute(ctx: &CommandContext, login: &str, names: &[String]) -> Result<()> {
    let Some(user) = ctx.find_user(login).await? else {
        bail!("no user {} in any search domain", login);
    };

    let mut groups = Vec::new();
    for domain in ctx.session.search_domains() {
        groups.extend(domain.groups(names).await?);
    }
    if groups.is_empty() {
        bail!("none of the groups {} exist", names.join(", "));
    }

    let validator = ctx.session.membership_validator().await;
    let membership = validator.perform(&user, &groups).await?;

    let result = CheckResult {
        user: user.dn().to_string(),
        is_member: membership.is_member,
        strategy: validator.kind().as_str(),
        matched: membership.groups.iter().map(|g| g.dn().to_string()).collect(),
        candidates: groups.iter().map(|g| g.dn().to_string()).collect(),
    };

    if ctx.is_json() {
        return ctx.print_json(&result);
    }

    let verdict = if result.is_member { "is a member" } else { "is not a member" };
    println!("{} {} ({})", result.user, verdict, result.strategy);
    for dn in &result.matched {
        println!("  via {}", dn);
    }

    Ok(())
}
