use derive_new::new;
use getset::{CopyGetters, Getters, Setters};

use crate::bufchain::BufChain;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptResult {
    Ready,
    Cancelled,
    Pending,
}

#[derive(Debug, new, Getters, CopyGetters, Setters)]
pub struct Prompt {
    #[get = "pub"]
    label: String,

    #[get_copy = "pub"]
    echo: bool,

    #[new(default)]
    #[get = "pub"]
    #[set = "pub"]
    result: String,
}

#[derive(Debug, Getters, CopyGetters)]
pub struct Prompts {
    #[get = "pub"]
    name: String,

    #[get_copy = "pub"]
    to_server: bool,

    #[get = "pub"]
    prompts: Vec<Prompt>,
}

impl Prompts {
    pub fn new(name: impl Into<String>, to_server: bool) -> Self {
        Self {
            name: name.into(),
            to_server,
            prompts: Vec::new(),
        }
    }

    pub fn add_prompt(&mut self, label: impl Into<String>, echo: bool) {
        self.prompts.push(Prompt::new(label.into(), echo));
    }

    pub fn prompts_mut(&mut self) -> &mut Vec<Prompt> {
        &mut self.prompts
    }
}

pub trait Frontend {
    // Returns the frontend's current backlog, for backpressure.
    fn from_backend(&mut self, stderr: bool, data: &[u8]) -> usize;

    fn connection_fatal(&mut self, msg: &str);

    fn notify_remote_exit(&mut self);

    // `input` carries freshly typed bytes when the user is answering,
    // None on first presentation.
    fn get_userpass_input(
        &mut self,
        prompts: &mut Prompts,
        input: Option<&mut BufChain>,
    ) -> PromptResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts() {
        let mut prompts = Prompts::new("Rlogin login name", true);
        prompts.add_prompt("rlogin username: ", true);
        assert!(prompts.to_server());
        assert_eq!(prompts.prompts().len(), 1);
        assert_eq!(prompts.prompts()[0].label(), "rlogin username: ");
        assert_eq!(prompts.prompts()[0].result(), "");

        prompts.prompts_mut()[0].set_result("bob".into());
        assert_eq!(prompts.prompts()[0].result(), "bob");
    }
}
