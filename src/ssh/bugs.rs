use std::ops::BitOr;

use log::info;

use crate::conf::{BugPolicy, Conf};
use crate::wildcard::wc_match;

// Discriminants are stable; they define the bit order of BugSet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bug {
    ChokesOnSsh1Ignore = 0,
    NeedsSsh1PlainPassword = 1,
    ChokesOnRsa = 2,
    Ssh2Hmac = 3,
    Ssh2DeriveKey = 4,
    Ssh2RsaPadding = 5,
    Ssh2PkSessionId = 6,
    Ssh2Rekey = 7,
    Ssh2MaxPkt = 8,
    ChokesOnSsh2Ignore = 9,
    Ssh2OldGex = 10,
    ChokesOnWinadj = 11,
    SendsLateRequestReply = 12,
}

impl Bug {
    pub const COUNT: usize = 13;

    pub const ALL: [Bug; Bug::COUNT] = [
        Bug::ChokesOnSsh1Ignore,
        Bug::NeedsSsh1PlainPassword,
        Bug::ChokesOnRsa,
        Bug::Ssh2Hmac,
        Bug::Ssh2DeriveKey,
        Bug::Ssh2RsaPadding,
        Bug::Ssh2PkSessionId,
        Bug::Ssh2Rekey,
        Bug::Ssh2MaxPkt,
        Bug::ChokesOnSsh2Ignore,
        Bug::Ssh2OldGex,
        Bug::ChokesOnWinadj,
        Bug::SendsLateRequestReply,
    ];

    pub fn config_key(self) -> &'static str {
        match self {
            Bug::ChokesOnSsh1Ignore => "sshbug_ignore1",
            Bug::NeedsSsh1PlainPassword => "sshbug_plainpw1",
            Bug::ChokesOnRsa => "sshbug_rsa1",
            Bug::Ssh2Hmac => "sshbug_hmac2",
            Bug::Ssh2DeriveKey => "sshbug_derivekey2",
            Bug::Ssh2RsaPadding => "sshbug_rsapad2",
            Bug::Ssh2PkSessionId => "sshbug_pksessid2",
            Bug::Ssh2Rekey => "sshbug_rekey2",
            Bug::Ssh2MaxPkt => "sshbug_maxpkt2",
            Bug::ChokesOnSsh2Ignore => "sshbug_ignore2",
            Bug::Ssh2OldGex => "sshbug_oldgex2",
            Bug::ChokesOnWinadj => "sshbug_winadj",
            Bug::SendsLateRequestReply => "sshbug_chanreq",
        }
    }

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BugSet(u32);

impl BugSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, bug: Bug) -> bool {
        self.0 & bug.bit() != 0
    }

    pub fn insert(&mut self, bug: Bug) {
        self.0 |= bug.bit();
    }

    pub fn contains_all(self, other: BugSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn iter(self) -> impl Iterator<Item = Bug> {
        Bug::ALL.iter().copied().filter(move |bug| self.contains(*bug))
    }
}

impl BitOr for BugSet {
    type Output = BugSet;

    fn bitor(self, rhs: BugSet) -> BugSet {
        BugSet(self.0 | rhs.0)
    }
}

impl std::iter::FromIterator<Bug> for BugSet {
    fn from_iter<I: IntoIterator<Item = Bug>>(iter: I) -> Self {
        let mut set = BugSet::empty();
        for bug in iter {
            set.insert(bug);
        }
        set
    }
}

struct BugEntry {
    bug: Bug,
    // Software versions triggering this bug under Auto policy. Exact
    // versions are just patterns without metacharacters.
    patterns: &'static [&'static str],
    // Implementations the patterns must NOT match, e.g. VShell, whose
    // version numbers collide with early ssh.com releases.
    exclude: Option<&'static str>,
    message: &'static str,
}

const BUG_TABLE: &[BugEntry] = &[
    BugEntry {
        bug: Bug::ChokesOnSsh1Ignore,
        patterns: &[
            "1.2.18", "1.2.19", "1.2.20", "1.2.21", "1.2.22",
            "Cisco-1.25", "OSU_1.4alpha3", "OSU_1.5alpha4",
        ],
        exclude: None,
        message: "has SSH-1 ignore bug",
    },
    BugEntry {
        bug: Bug::NeedsSsh1PlainPassword,
        patterns: &["Cisco-1.25", "OSU_1.4alpha3"],
        exclude: None,
        message: "needs a plain SSH-1 password",
    },
    BugEntry {
        bug: Bug::ChokesOnRsa,
        patterns: &["Cisco-1.25"],
        exclude: None,
        message: "can't handle SSH-1 RSA authentication",
    },
    BugEntry {
        bug: Bug::Ssh2Hmac,
        patterns: &["2.1.0*", "2.0.*", "2.2.0*", "2.3.0*", "2.1 *"],
        exclude: Some("* VShell"),
        message: "has SSH-2 HMAC bug",
    },
    BugEntry {
        bug: Bug::Ssh2DeriveKey,
        patterns: &["2.0.0*", "2.0.10*"],
        exclude: Some("* VShell"),
        message: "has SSH-2 key-derivation bug",
    },
    BugEntry {
        bug: Bug::Ssh2RsaPadding,
        patterns: &[
            "OpenSSH_2.[5-9]*",
            "OpenSSH_3.[0-2]*",
            "mod_sftp/0.[0-8]*",
            "mod_sftp/0.9.[0-8]",
        ],
        exclude: None,
        message: "has SSH-2 RSA padding bug",
    },
    BugEntry {
        bug: Bug::Ssh2PkSessionId,
        patterns: &["OpenSSH_2.[0-2]*"],
        exclude: None,
        message: "has SSH-2 public-key session-ID bug",
    },
    BugEntry {
        bug: Bug::Ssh2Rekey,
        patterns: &[
            "DigiSSH_2.0",
            "OpenSSH_2.[0-4]*",
            "OpenSSH_2.5.[0-3]*",
            "Sun_SSH_1.0",
            "Sun_SSH_1.0.1",
            // All versions <= 1.2.6; they changed their format in 1.2.7.
            "WeOnlyDo-*",
        ],
        exclude: None,
        message: "has SSH-2 rekey bug",
    },
    BugEntry {
        bug: Bug::Ssh2MaxPkt,
        patterns: &["1.36_sshlib GlobalSCAPE", "1.36 sshlib: GlobalScape"],
        exclude: None,
        message: "ignores SSH-2 maximum packet size",
    },
    BugEntry {
        bug: Bug::ChokesOnSsh2Ignore,
        // None detected automatically.
        patterns: &[],
        exclude: None,
        message: "has SSH-2 ignore bug",
    },
    BugEntry {
        bug: Bug::Ssh2OldGex,
        patterns: &["OpenSSH_2.[235]*"],
        exclude: None,
        message: "has outdated SSH-2 GEX",
    },
    BugEntry {
        bug: Bug::ChokesOnWinadj,
        // None detected automatically.
        patterns: &[],
        exclude: None,
        message: "has winadj bug",
    },
    BugEntry {
        bug: Bug::SendsLateRequestReply,
        // OpenSSH 6.7+ and dropbear 0.52+ replied in order again.
        patterns: &[
            "OpenSSH_[2-5].*",
            "OpenSSH_6.[0-6]*",
            "dropbear_0.[2-4][0-9]*",
            "dropbear_0.5[01]*",
        ],
        exclude: None,
        message: "has SSH-2 channel request bug",
    },
];

/// Compare the remote software version against the list of known buggy
/// implementations.
pub fn detect_bugs(conf: &Conf, softwareversion: &str) -> BugSet {
    scan_table(BUG_TABLE, conf, softwareversion)
}

fn scan_table(table: &[BugEntry], conf: &Conf, imp: &str) -> BugSet {
    let mut bugs = BugSet::empty();
    for entry in table {
        let hit = match conf.bug_policy(entry.bug) {
            BugPolicy::ForceOn => true,
            BugPolicy::ForceOff => false,
            BugPolicy::Auto => {
                entry.exclude.map_or(true, |pattern| !wc_match(pattern, imp))
                    && entry.patterns.iter().any(|pattern| wc_match(pattern, imp))
            }
        };
        if hit {
            bugs.insert(entry.bug);
            info!("we believe remote version {}", entry.message);
        }
    }
    bugs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::ConfBuilder;

    fn detected(imp: &str) -> BugSet {
        detect_bugs(&Conf::default(), imp)
    }

    #[test]
    fn test_clean_implementation() {
        assert!(detected("OpenSSH_8.9").is_empty());
        assert!(detected("OpenSSH_6.7p1").is_empty());
        assert!(detected("dropbear_2020.81").is_empty());
    }

    #[test]
    fn test_ssh1_era_bugs() {
        let bugs = detected("Cisco-1.25");
        assert!(bugs.contains(Bug::ChokesOnSsh1Ignore));
        assert!(bugs.contains(Bug::NeedsSsh1PlainPassword));
        assert!(bugs.contains(Bug::ChokesOnRsa));

        let bugs = detected("1.2.20");
        assert!(bugs.contains(Bug::ChokesOnSsh1Ignore));
        assert!(!bugs.contains(Bug::ChokesOnRsa));
    }

    #[test]
    fn test_old_openssh() {
        let bugs = detected("OpenSSH_2.3.0p1");
        let expect = [Bug::Ssh2Rekey, Bug::Ssh2OldGex, Bug::SendsLateRequestReply]
            .iter()
            .copied()
            .collect::<BugSet>();
        assert_eq!(bugs, expect);

        let bugs = detected("OpenSSH_2.1.0");
        assert!(bugs.contains(Bug::Ssh2PkSessionId));
        assert!(bugs.contains(Bug::Ssh2Rekey));
        assert!(!bugs.contains(Bug::Ssh2OldGex));

        let bugs = detected("OpenSSH_2.5.2p2");
        assert!(bugs.contains(Bug::Ssh2RsaPadding));
        assert!(bugs.contains(Bug::Ssh2Rekey));
        assert!(bugs.contains(Bug::Ssh2OldGex));
        assert!(!bugs.contains(Bug::Ssh2PkSessionId));
    }

    #[test]
    fn test_vshell_excluded() {
        // VShell reuses ssh.com-style version numbers but has neither bug.
        assert!(!detected("2.1.0 VShell").contains(Bug::Ssh2Hmac));
        assert!(!detected("2.0.0 VShell").contains(Bug::Ssh2DeriveKey));
        assert!(detected("2.1.0.10").contains(Bug::Ssh2Hmac));
        assert!(detected("2.0.0").contains(Bug::Ssh2DeriveKey));
    }

    #[test]
    fn test_globalscape() {
        assert!(detected("1.36_sshlib GlobalSCAPE").contains(Bug::Ssh2MaxPkt));
        assert!(detected("1.36 sshlib: GlobalScape").contains(Bug::Ssh2MaxPkt));
        assert!(!detected("1.37_sshlib GlobalSCAPE").contains(Bug::Ssh2MaxPkt));
    }

    #[test]
    fn test_late_request_reply_boundaries() {
        assert!(detected("OpenSSH_6.6.1p1").contains(Bug::SendsLateRequestReply));
        assert!(!detected("OpenSSH_6.7p1").contains(Bug::SendsLateRequestReply));
        assert!(detected("dropbear_0.51").contains(Bug::SendsLateRequestReply));
        assert!(!detected("dropbear_0.52").contains(Bug::SendsLateRequestReply));
    }

    #[test]
    fn test_force_on_and_off() {
        let conf = ConfBuilder::default()
            .bug(Bug::ChokesOnWinadj, BugPolicy::ForceOn)
            .bug(Bug::Ssh2Rekey, BugPolicy::ForceOff)
            .build()
            .unwrap();
        let bugs = detect_bugs(&conf, "OpenSSH_2.3.0p1");
        assert!(bugs.contains(Bug::ChokesOnWinadj));
        assert!(!bugs.contains(Bug::Ssh2Rekey));
        assert!(bugs.contains(Bug::Ssh2OldGex));
    }

    #[test]
    fn test_force_monotonic() {
        // Forcing one bug on never clears auto-detected bits, and forcing
        // one off never sets any.
        for bug in Bug::ALL.iter().copied() {
            let auto = detect_bugs(&Conf::default(), "OpenSSH_2.3.0p1");

            let on = ConfBuilder::default()
                .bug(bug, BugPolicy::ForceOn)
                .build()
                .unwrap();
            let forced_on = detect_bugs(&on, "OpenSSH_2.3.0p1");
            assert!(forced_on.contains_all(auto), "{:?}", bug);

            let off = ConfBuilder::default()
                .bug(bug, BugPolicy::ForceOff)
                .build()
                .unwrap();
            let forced_off = detect_bugs(&off, "OpenSSH_2.3.0p1");
            assert!(auto.contains_all(forced_off), "{:?}", bug);
        }
    }

    #[test]
    fn test_synthetic_table() {
        let table = [BugEntry {
            bug: Bug::ChokesOnWinadj,
            patterns: &["testssh_1.*"],
            exclude: Some("testssh_1.9*"),
            message: "has winadj bug",
        }];
        let conf = Conf::default();
        assert!(scan_table(&table, &conf, "testssh_1.0").contains(Bug::ChokesOnWinadj));
        assert!(!scan_table(&table, &conf, "testssh_1.9").contains(Bug::ChokesOnWinadj));
        assert!(!scan_table(&table, &conf, "othssh_1.0").contains(Bug::ChokesOnWinadj));
    }

    #[test]
    fn test_bugset_ops() {
        let mut a = BugSet::empty();
        a.insert(Bug::ChokesOnRsa);
        let mut b = BugSet::empty();
        b.insert(Bug::Ssh2Rekey);

        let union = a | b;
        assert!(union.contains(Bug::ChokesOnRsa));
        assert!(union.contains(Bug::Ssh2Rekey));
        assert!(union.contains_all(a));
        assert_eq!(union.iter().count(), 2);
    }

    #[test]
    fn test_config_keys_unique() {
        let mut keys = Bug::ALL.iter().map(|bug| bug.config_key()).collect::<Vec<_>>();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), Bug::COUNT);
    }
}
