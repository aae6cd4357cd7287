//! Rlogin backend.

use bytes::{BufMut as _, BytesMut};
use log::{debug, warn};

use crate::backend::{Backend, Plug};
use crate::bufchain::BufChain;
use crate::conf::Conf;
use crate::error::ConnectError;
use crate::frontend::{Frontend, PromptResult, Prompts};
use crate::socket::{Socket, SocketFactory};

const MAX_BACKLOG: usize = 4096;

pub const DEFAULT_PORT: u16 = 513;

#[derive(Debug)]
pub struct Rlogin {
    socket: Option<Box<dyn Socket>>,
    closed_on_socket_error: bool,
    bufsize: usize,
    firstbyte: bool,
    cansize: bool,
    term_width: u16,
    term_height: u16,
    conf: Conf,

    // Set while we still owe the server a remote username.
    prompt: Option<Prompts>,
}

impl Rlogin {
    // Also returns the canonical host name to present for the session,
    // which loghost overrides.
    pub fn init(
        frontend: &mut dyn Frontend,
        conf: &Conf,
        factory: &mut dyn SocketFactory,
        host: &str,
        port: i32,
        nodelay: bool,
        keepalive: bool,
        term_width: u16,
        term_height: u16,
    ) -> Result<(Self, String), ConnectError> {
        let port = if port < 0 { DEFAULT_PORT } else { port as u16 };

        // Rlogin servers insist on a reserved source port.
        let (socket, mut realhost) =
            factory.connect(host, port, true, nodelay, keepalive, conf.address_family())?;

        if !conf.loghost().is_empty() {
            realhost = conf.loghost().clone();
            if let Some(colon) = realhost.rfind(':') {
                realhost.truncate(colon);
            }
        }

        let mut rlogin = Rlogin {
            socket: Some(socket),
            closed_on_socket_error: false,
            bufsize: 0,
            firstbyte: true,
            cansize: false,
            term_width,
            term_height,
            conf: conf.clone(),
            prompt: None,
        };

        // Send local username, remote username, terminal type and speed
        // now, unless the remote username is unknown, in which case
        // everything waits on the local prompt.
        if rlogin.conf.username().is_empty() {
            let mut prompts = Prompts::new("Rlogin login name", true);
            prompts.add_prompt("rlogin username: ", true);
            match frontend.get_userpass_input(&mut prompts, None) {
                PromptResult::Pending => rlogin.prompt = Some(prompts),
                _ => {
                    let ruser = prompts.prompts()[0].result().to_string();
                    rlogin.startup(&ruser);
                }
            }
        } else {
            let ruser = rlogin.conf.username().clone();
            rlogin.startup(&ruser);
        }

        Ok((rlogin, realhost))
    }

    // The startup fields go out as one write, so no user byte can be
    // interleaved into the sequence.
    fn startup(&mut self, ruser: &str) {
        let mut buf = BytesMut::new();
        buf.put_u8(0);
        buf.put_slice(self.conf.local_username().as_bytes());
        buf.put_u8(0);
        buf.put_slice(ruser.as_bytes());
        buf.put_u8(0);
        buf.put_slice(self.conf.termtype().as_bytes());
        buf.put_u8(b'/');
        let speed = self.conf.termspeed().as_bytes();
        let digits = speed.iter().take_while(|b| b.is_ascii_digit()).count();
        buf.put_slice(&speed[..digits]);
        buf.put_u8(0);

        if let Some(socket) = self.socket.as_mut() {
            self.bufsize = socket.write(&buf);
        }
        self.prompt = None;
    }

    fn deliver(&mut self, frontend: &mut dyn Frontend, data: &[u8]) {
        let backlog = frontend.from_backend(false, data);
        if let Some(socket) = self.socket.as_mut() {
            socket.set_frozen(backlog > MAX_BACKLOG);
        }
    }
}

impl Backend for Rlogin {
    fn send(&mut self, frontend: &mut dyn Frontend, data: &[u8]) -> usize {
        if self.socket.is_none() {
            return 0;
        }

        let mut bc = BufChain::new();
        bc.add(data.to_vec());

        if let Some(mut prompts) = self.prompt.take() {
            // Still prompting for a username; typed bytes feed the
            // prompt engine, not the network.
            match frontend.get_userpass_input(&mut prompts, Some(&mut bc)) {
                PromptResult::Pending => self.prompt = Some(prompts),
                _ => {
                    let ruser = prompts.prompts()[0].result().to_string();
                    self.startup(&ruser);
                }
            }
        }

        if self.prompt.is_none() {
            while !bc.is_empty() {
                let n = {
                    let chunk = bc.prefix();
                    if let Some(socket) = self.socket.as_mut() {
                        self.bufsize = socket.write(chunk);
                    }
                    chunk.len()
                };
                bc.consume(n);
            }
        }

        self.bufsize
    }

    fn sendbuffer(&self) -> usize {
        self.bufsize
    }

    fn size(&mut self, width: u16, height: u16) {
        self.term_width = width;
        self.term_height = height;

        if !self.cansize {
            return;
        }
        if let Some(socket) = self.socket.as_mut() {
            let mut frame = [0u8; 12];
            frame[..4].copy_from_slice(&[0xff, 0xff, 0x73, 0x73]);
            frame[4..6].copy_from_slice(&height.to_be_bytes());
            frame[6..8].copy_from_slice(&width.to_be_bytes());
            // Pixel dimensions are reported as zero.
            self.bufsize = socket.write(&frame);
        }
    }

    fn connected(&self) -> bool {
        self.socket.is_some()
    }

    fn unthrottle(&mut self, backlog: usize) {
        if let Some(socket) = self.socket.as_mut() {
            socket.set_frozen(backlog > MAX_BACKLOG);
        }
    }

    fn exitcode(&self) -> i32 {
        if self.socket.is_some() {
            -1
        } else if self.closed_on_socket_error {
            // A socket error counts as an unclean exit.
            i32::MAX
        } else {
            0
        }
    }
}

impl Plug for Rlogin {
    fn closing(&mut self, frontend: &mut dyn Frontend, error_msg: Option<&str>) {
        // No independent EOF in each direction: as soon as the remote
        // side is done, the whole connection winds up.
        if let Some(mut socket) = self.socket.take() {
            socket.close();
            if error_msg.is_some() {
                self.closed_on_socket_error = true;
            }
            frontend.notify_remote_exit();
        }
        if let Some(msg) = error_msg {
            warn!("{}", msg);
            frontend.connection_fatal(msg);
        }
    }

    fn receive(&mut self, frontend: &mut dyn Frontend, urgent: bool, data: &[u8]) {
        if urgent {
            let control = match data.first() {
                Some(control) => *control,
                None => return,
            };
            if control == 0x80 {
                self.cansize = true;
                let (width, height) = (self.term_width, self.term_height);
                self.size(width, height);
            } else {
                // 0x02 asks for a flush and 0x10/0x20 toggle local flow
                // control; neither is worth honouring.
                debug!("ignoring urgent byte {:#04x}", control);
            }
        } else {
            let mut data = data;
            // The server acknowledges startup with a single NUL.
            if self.firstbyte {
                if data.first() == Some(&0) {
                    data = &data[1..];
                }
                self.firstbyte = false;
            }
            if !data.is_empty() {
                self.deliver(frontend, data);
            }
        }
    }

    fn sent(&mut self, bufsize: usize) {
        self.bufsize = bufsize;
    }
}

impl Drop for Rlogin {
    fn drop(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            socket.close();
        }
    }
}
