use std::fmt::Debug;

use crate::conf::AddressFamily;
use crate::error::ConnectError;

pub trait Socket: Debug {
    // Returns the sender-side backlog, for backpressure.
    fn write(&mut self, data: &[u8]) -> usize;

    fn close(&mut self);

    fn set_frozen(&mut self, frozen: bool);
}

pub trait SocketFactory {
    // Returns the connected socket and the canonical host name.
    // `privport` requests a reserved source port; rlogin servers demand
    // one.
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        privport: bool,
        nodelay: bool,
        keepalive: bool,
        address_family: AddressFamily,
    ) -> Result<(Box<dyn Socket>, String), ConnectError>;
}
