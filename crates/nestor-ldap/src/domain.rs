//! A search base bound to a session

use crate::filter::{group_filter, member_filter, posix_member_filter};
use crate::membership::ValidateMembership;
use crate::session::LdapSession;
use nestor_core::types::{DirectoryEntry, Filter, SearchRequest, MEMBER_UID_ATTRIBUTE};
use nestor_core::Result;
use tracing::debug;

#[derive(Clone)]
pub struct Domain {
    base: String,
    session: LdapSession,
}

impl Domain {
    pub(crate) fn new(base: impl Into<String>, session: LdapSession) -> Self {
        Self {
            base: base.into(),
            session,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Run a search, under this domain unless the request names its own base
    pub async fn search(&self, request: SearchRequest) -> Result<Vec<DirectoryEntry>> {
        let request = if request.base.is_empty() {
            request.with_base(self.base.clone())
        } else {
            request
        };

        self.session.search(&request).await
    }

    /// Subtree search of the domain
    pub async fn find(&self, filter: Filter, attributes: &[&str]) -> Result<Vec<DirectoryEntry>> {
        self.search(SearchRequest::new(self.base.clone(), filter).attributes(attributes.iter().copied()))
            .await
    }

    /// Entries listing members by DN, or by uid when POSIX support is on
    fn has_members(&self) -> Filter {
        if self.session.posix_support_enabled() {
            member_filter(None) | Filter::present(MEMBER_UID_ATTRIBUTE)
        } else {
            member_filter(None)
        }
    }

    /// Groups with members whose `cn` is one of `names`
    pub async fn groups<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<DirectoryEntry>> {
        let Some(names) = group_filter(names) else {
            return Ok(Vec::new());
        };

        self.find(self.has_members() & names, &[]).await
    }

    /// Every group with members under the base
    pub async fn all_groups(&self) -> Result<Vec<DirectoryEntry>> {
        self.find(self.has_members(), &[]).await
    }

    /// Groups among `names` that list the entry directly
    pub async fn membership<S: AsRef<str>>(&self, entry: &DirectoryEntry, names: &[S]) -> Result<Vec<DirectoryEntry>> {
        let Some(names) = group_filter(names) else {
            return Ok(Vec::new());
        };

        let mut direct = member_filter(Some(entry.dn()));
        if self.session.posix_support_enabled() {
            if let Some(posix) = posix_member_filter(entry, self.session.uid()) {
                direct = direct | posix;
            }
        }

        self.find(direct & names, &[]).await
    }

    /// True when `names` is empty or the entry is a direct member of one of them
    pub async fn is_member<S: AsRef<str>>(&self, entry: &DirectoryEntry, names: &[S]) -> Result<bool> {
        if names.is_empty() {
            return Ok(true);
        }
        Ok(!self.membership(entry, names).await?.is_empty())
    }

    /// Look a user up by login
    pub async fn user(&self, login: &str) -> Result<Option<DirectoryEntry>> {
        let user_search = self.session.user_search().await;
        let entries = user_search.perform(&self.session, &self.base, login).await?;
        Ok(entries.into_iter().next())
    }

    /// The user's entry when `password` binds as it
    pub async fn valid_login(&self, login: &str, password: &str) -> Result<Option<DirectoryEntry>> {
        let Some(user) = self.user(login).await? else {
            debug!("No user {} under {}", login, self.base);
            return Ok(None);
        };

        if self.session.client().bind(user.dn(), password).await? {
            Ok(Some(user))
        } else {
            debug!("Bind rejected for {}", user.dn());
            Ok(None)
        }
    }

    /// Valid login that also passes membership validation against `names`
    pub async fn authenticate<S: AsRef<str>>(
        &self,
        login: &str,
        password: &str,
        names: &[S],
    ) -> Result<Option<DirectoryEntry>> {
        let Some(user) = self.valid_login(login, password).await? else {
            return Ok(None);
        };

        if names.is_empty() {
            return Ok(Some(user));
        }

        // Named groups that do not exist must not open the gate
        let groups = self.groups(names).await?;
        if groups.is_empty() {
            debug!("None of the required groups exist under {}", self.base);
            return Ok(None);
        }

        let validator = self.session.membership_validator().await;
        let membership = validator.perform(&user, &groups).await?;
        Ok(membership.is_member.then_some(user))
    }
}
