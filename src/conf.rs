use derive_builder::Builder;
use getset::{CopyGetters, Getters};

use crate::ssh::bugs::Bug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    Unspec,
    Inet,
    Inet6,
}

impl Default for AddressFamily {
    fn default() -> Self {
        Self::Unspec
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BugPolicy {
    Auto,
    ForceOn,
    ForceOff,
}

impl Default for BugPolicy {
    fn default() -> Self {
        Self::Auto
    }
}

// Immutable snapshot; backends clone it at init and never observe later
// edits.
#[derive(Debug, Clone, Default, Builder, Getters, CopyGetters)]
#[builder(default)]
pub struct Conf {
    // Remote login name. Empty means the backend prompts for it.
    #[get = "pub"]
    username: String,

    #[get = "pub"]
    local_username: String,

    #[get = "pub"]
    termtype: String,

    #[get = "pub"]
    termspeed: String,

    #[get = "pub"]
    loghost: String,

    #[get_copy = "pub"]
    address_family: AddressFamily,

    #[get = "pub"]
    protoversion: String,

    bug_policies: [BugPolicy; Bug::COUNT],
}

impl Conf {
    pub fn bug_policy(&self, bug: Bug) -> BugPolicy {
        self.bug_policies[bug as usize]
    }
}

impl ConfBuilder {
    pub fn bug(&mut self, bug: Bug, policy: BugPolicy) -> &mut Self {
        let policies = self
            .bug_policies
            .get_or_insert_with(|| [BugPolicy::Auto; Bug::COUNT]);
        policies[bug as usize] = policy;
        self
    }
}
