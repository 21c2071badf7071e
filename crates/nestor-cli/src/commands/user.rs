//! user command - look a user up by login

use super::{print_entry, CommandContext, EntryView};
use anyhow::{bail, Result};

pub async fn execute(ctx: &CommandContext, login: &str) -> Result<()> {
    let Some(user) = ctx.find_user(login).await? else {
        bail!("no user {} in any search domain", login);
    };

    if ctx.is_json() {
        ctx.print_json(&EntryView::from(&user))
    } else {
        print_entry(&user);
        Ok(())
    }
}
