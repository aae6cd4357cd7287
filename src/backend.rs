use crate::conf::Conf;
use crate::frontend::Frontend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialCode {
    Break,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LdiscOption {
    Echo,
    Edit,
}

pub trait Backend {
    fn send(&mut self, frontend: &mut dyn Frontend, data: &[u8]) -> usize;

    fn sendbuffer(&self) -> usize;

    fn size(&mut self, width: u16, height: u16);

    fn special(&mut self, _code: SpecialCode) {}

    fn get_specials(&self) -> &[SpecialCode] {
        &[]
    }

    fn connected(&self) -> bool;

    fn sendok(&self) -> bool {
        true
    }

    fn ldisc_option(&self, _option: LdiscOption) -> bool {
        false
    }

    fn unthrottle(&mut self, backlog: usize);

    /// `-1` while connected, `i32::MAX` after a socket error, `0` after
    /// a clean remote close.
    fn exitcode(&self) -> i32;

    fn reconfig(&mut self, _conf: &Conf) {}
}

// Network-event callbacks, delivered by whatever owns the socket.
pub trait Plug {
    fn closing(&mut self, frontend: &mut dyn Frontend, error_msg: Option<&str>);

    fn receive(&mut self, frontend: &mut dyn Frontend, urgent: bool, data: &[u8]);

    fn sent(&mut self, bufsize: usize);
}
