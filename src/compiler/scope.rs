/// The compile-time mirror of the runtime environment.
/// Every frame pushed at runtime with `env_new` has a name here,
/// so resolving a name is counting the frames between it and the top.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scopes {
    frames: Vec<Option<String>>,
}

impl Scopes {
    pub fn new() -> Scopes {
        Default::default()
    }

    /// Pushes a frame binding `name`.
    pub fn push(&mut self, name: &str) {
        self.frames.push(Some(name.to_string()));
    }

    /// Pushes a frame that can not be referred to by name,
    /// like the self slot of an anonymous function.
    pub fn push_anonymous(&mut self) {
        self.frames.push(None);
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    /// How many frames are open, to hand back to `restore`.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Truncates back to a previously observed depth.
    pub fn restore(&mut self, len: usize) {
        self.frames.truncate(len);
    }

    /// The number of frames between the innermost binding of `name`
    /// and the top of the environment.
    /// Inner bindings shadow outer ones.
    pub fn distance(&self, name: &str) -> Option<usize> {
        self.frames.iter().rev()
            .position(|frame| frame.as_deref() == Some(name))
    }
}
