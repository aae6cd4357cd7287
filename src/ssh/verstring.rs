//! The initial SSH version string exchange.
//!
//! [Protocol Version Exchange](https://tools.ietf.org/html/rfc4253#section-4.2)

use std::cmp::Ordering;

use bytes::Bytes;
use getset::{CopyGetters, Getters};
use log::info;

use crate::bufchain::BufChain;
use crate::conf::Conf;
use crate::error::HandshakeError;
use crate::ssh::bugs::{detect_bugs, BugSet};
use crate::ssh::vercmp::{includes_v1, includes_v2, vercmp};

pub const SSH_PREFIX: &str = "SSH-";

// Banner prefix for the bare ssh-connection subprotocol, a name in our
// extension space so the two wire formats cannot be confused.
pub const BARE_PREFIX: &str = "SSHCONNECTION@putty.projects.tartarus.org-";

const PREFIX_MAXLEN: usize = 64;

// Upper bound on the greeting line, terminator included.
const VSTRING_MAXLEN: usize = 4096;

const SOFTWARE_ID: &str = concat!("remsh-", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Pending,
    Done(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SeekPrefix,
    SkipLine,
    CollectTail,
    Done,
    Failed,
}

#[derive(Debug, CopyGetters)]
pub struct VersionHandshake {
    conf: Conf,
    want_prefix: &'static str,
    our_protoversion: String,

    // We send our banner before reading the peer's unless we might
    // still have to downgrade it to match an SSH-1 peer.
    #[get_copy = "pub"]
    send_early: bool,

    sent_banner: bool,
    state: State,

    // Greeting line under construction, prefix included.
    vstring: Vec<u8>,

    remote_vstring: Option<String>,
    our_vstring: Option<String>,
    protoversion: Option<String>,
    softwareversion_at: usize,

    #[get_copy = "pub"]
    remote_bugs: BugSet,

    major_protoversion: u32,

    failure: Option<HandshakeError>,

    in_raw: BufChain,
    out_raw: BufChain,
}

impl VersionHandshake {
    pub fn new(conf: &Conf, bare_mode: bool, our_protoversion: &str) -> Self {
        let want_prefix = if bare_mode { BARE_PREFIX } else { SSH_PREFIX };
        assert!(want_prefix.len() <= PREFIX_MAXLEN);

        Self {
            conf: conf.clone(),
            want_prefix,
            our_protoversion: our_protoversion.to_string(),
            send_early: !includes_v1(our_protoversion),
            sent_banner: false,
            state: State::SeekPrefix,
            vstring: Vec::new(),
            remote_vstring: None,
            our_vstring: None,
            protoversion: None,
            softwareversion_at: 0,
            remote_bugs: BugSet::empty(),
            major_protoversion: 0,
            failure: None,
            in_raw: BufChain::new(),
            out_raw: BufChain::new(),
        }
    }

    pub fn in_raw_mut(&mut self) -> &mut BufChain {
        &mut self.in_raw
    }

    pub fn out_raw_mut(&mut self) -> &mut BufChain {
        &mut self.out_raw
    }

    // Suspends whenever the chain runs out of bytes; re-entry with no
    // new input is a no-op.
    pub fn handle_input(&mut self) -> Result<Progress, HandshakeError> {
        match self.state {
            State::Done => panic!("version exchange already complete"),
            State::Failed => return Err(self.failure.clone().unwrap()),
            _ => {}
        }

        if self.send_early && !self.sent_banner {
            self.send_banner();
        }

        loop {
            match self.state {
                State::SeekPrefix => {
                    let want = self.want_prefix.as_bytes();
                    if self.in_raw.len() < want.len() {
                        return Ok(Progress::Pending);
                    }
                    let mut head = [0u8; PREFIX_MAXLEN];
                    let head = &mut head[..want.len()];
                    self.in_raw.fetch(head);
                    if &head[..] == want {
                        self.in_raw.consume(want.len());
                        self.vstring.extend_from_slice(want);
                        self.state = State::CollectTail;
                    } else {
                        self.state = State::SkipLine;
                    }
                }

                State::SkipLine => {
                    // Anything before the greeting (MOTDs, TCP-wrapper
                    // chatter) is discarded line by line.
                    if self.in_raw.is_empty() {
                        return Ok(Progress::Pending);
                    }
                    let chunk = self.in_raw.prefix();
                    match chunk.iter().position(|b| *b == b'\n') {
                        Some(nl) => {
                            self.in_raw.consume(nl + 1);
                            self.state = State::SeekPrefix;
                        }
                        None => {
                            let n = chunk.len();
                            self.in_raw.consume(n);
                        }
                    }
                }

                State::CollectTail => {
                    if self.in_raw.is_empty() {
                        return Ok(Progress::Pending);
                    }
                    let take = {
                        let chunk = self.in_raw.prefix();
                        match chunk.iter().position(|b| *b == b'\n') {
                            Some(nl) => nl + 1,
                            None => chunk.len(),
                        }
                    };
                    if self.vstring.len() + take > VSTRING_MAXLEN {
                        return self.fail(HandshakeError::BannerTooLong(VSTRING_MAXLEN));
                    }
                    {
                        let chunk = self.in_raw.prefix();
                        self.vstring.extend_from_slice(&chunk[..take]);
                    }
                    self.in_raw.consume(take);
                    if self.vstring.last() == Some(&b'\n') {
                        return self.finish();
                    }
                }

                State::Done | State::Failed => unreachable!(),
            }
        }
    }

    pub fn remote_version(&self) -> Option<&str> {
        self.remote_vstring.as_deref()
    }

    pub fn local_version(&self) -> Option<&str> {
        self.our_vstring.as_deref()
    }

    pub fn protoversion(&self) -> Option<&str> {
        self.protoversion.as_deref()
    }

    pub fn softwareversion(&self) -> Option<&str> {
        self.remote_vstring
            .as_deref()
            .map(|v| &v[self.softwareversion_at..])
    }

    // The remote greeting line is needed verbatim later, in
    // key-exchange hashing.
    pub fn into_outcome(self) -> VersionOutcome {
        match self.state {
            State::Done => {}
            _ => panic!("version exchange not complete"),
        }
        let remote_version = self.remote_vstring.unwrap();
        let softwareversion = remote_version[self.softwareversion_at..].to_string();
        VersionOutcome {
            major: self.major_protoversion,
            remote_version,
            local_version: self.our_vstring.unwrap(),
            protoversion: self.protoversion.unwrap(),
            softwareversion,
            bugs: self.remote_bugs,
        }
    }

    fn send_banner(&mut self) {
        let vstring = make_banner(self.want_prefix, &self.our_protoversion, SOFTWARE_ID);
        info!("we claim version: {}", vstring);
        self.out_raw.add(Bytes::from(vstring.clone()));
        if includes_v2(&self.our_protoversion) {
            self.out_raw.add(&b"\r\n"[..]);
        } else {
            self.out_raw.add(&b"\n"[..]);
        }
        self.our_vstring = Some(vstring);
        self.sent_banner = true;
    }

    fn finish(&mut self) -> Result<Progress, HandshakeError> {
        while let Some(&b) = self.vstring.last() {
            if b != b'\r' && b != b'\n' {
                break;
            }
            self.vstring.pop();
        }

        let vstring = match String::from_utf8(std::mem::replace(&mut self.vstring, Vec::new())) {
            Ok(vstring) => vstring,
            Err(err) => {
                let lossy = String::from_utf8_lossy(err.as_bytes()).into_owned();
                return self.fail(HandshakeError::MalformedBanner(lossy));
            }
        };
        info!("remote version: {}", vstring);

        // The protocol version gets its own allocation; the software
        // version is the tail of the greeting line.
        let rest = &vstring[self.want_prefix.len()..];
        let pv_len = rest.find('-').unwrap_or_else(|| rest.len());
        if pv_len == 0 {
            return self.fail(HandshakeError::MalformedBanner(vstring.clone()));
        }
        let protoversion = rest[..pv_len].to_string();
        let softwareversion_at =
            self.want_prefix.len() + pv_len + if pv_len < rest.len() { 1 } else { 0 };

        self.remote_bugs = detect_bugs(&self.conf, &vstring[softwareversion_at..]);

        let major = if includes_v2(&self.our_protoversion) && includes_v2(&protoversion) {
            2
        } else if includes_v1(&self.our_protoversion) && includes_v1(&protoversion) {
            // SSH-1 has several minor versions and the protocol does not
            // take the minimum of both sides, so our outgoing version
            // must not exceed the peer's.
            if !self.send_early
                && vercmp(&self.our_protoversion, &protoversion) == Ordering::Greater
            {
                self.our_protoversion = protoversion.clone();
            }
            1
        } else if !includes_v2(&self.our_protoversion) {
            return self.fail(HandshakeError::RemoteLacksV1);
        } else {
            return self.fail(HandshakeError::RemoteLacksV2);
        };
        info!("using SSH protocol version {}", major);

        if !self.send_early {
            // Now that the peer's version is known, ours is final too.
            self.send_banner();
        }

        self.remote_vstring = Some(vstring);
        self.protoversion = Some(protoversion);
        self.softwareversion_at = softwareversion_at;
        self.major_protoversion = major;
        self.state = State::Done;
        Ok(Progress::Done(major))
    }

    fn fail(&mut self, err: HandshakeError) -> Result<Progress, HandshakeError> {
        self.state = State::Failed;
        self.failure = Some(err.clone());
        Err(err)
    }
}

#[derive(Debug, Clone, Getters, CopyGetters)]
pub struct VersionOutcome {
    #[get_copy = "pub"]
    major: u32,

    #[get = "pub"]
    remote_version: String,

    #[get = "pub"]
    local_version: String,

    #[get = "pub"]
    protoversion: String,

    #[get = "pub"]
    softwareversion: String,

    #[get_copy = "pub"]
    bugs: BugSet,
}

fn make_banner(prefix: &str, protoversion: &str, software: &str) -> String {
    // A '-' or ' ' in the software tail would break the split between
    // protocol version and software version on the far side.
    let tail = software
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c,
        })
        .collect::<String>();
    format!("{}{}-{}", prefix, protoversion, tail)
}
