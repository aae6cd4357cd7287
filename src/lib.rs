pub use crate::backend::{Backend, LdiscOption, Plug, SpecialCode};
pub use crate::bufchain::BufChain;
pub use crate::conf::{AddressFamily, BugPolicy, Conf, ConfBuilder};
pub use crate::error::{ConnectError, ExchangeError, HandshakeError};
pub use crate::frontend::{Frontend, Prompt, PromptResult, Prompts};
pub use crate::net::exchange_versions;
pub use crate::rlogin::Rlogin;
pub use crate::socket::{Socket, SocketFactory};
pub use crate::ssh::bugs::{detect_bugs, Bug, BugSet};
pub use crate::ssh::vercmp::{includes_v1, includes_v2, vercmp};
pub use crate::ssh::verstring::{
    Progress, VersionHandshake, VersionOutcome, BARE_PREFIX, SSH_PREFIX,
};
pub use crate::wildcard::wc_match;

mod backend;
mod bufchain;
mod conf;
mod error;
mod frontend;
mod net;
mod rlogin;
mod socket;
mod ssh;
mod wildcard;
