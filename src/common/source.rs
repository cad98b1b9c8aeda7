use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    rc::Rc,
};

/// `Source` represents some literal PicoML source code,
/// either a file on disk or a snippet handed over by a host.
/// The compiler back end never reads it; spans point into it
/// so that errors can be rendered against the original text.
/// Sources without a path point to `./source`.
#[derive(Debug, PartialEq, Eq)]
pub struct Source {
    pub contents: String,
    pub path: PathBuf,
}

impl Source {
    /// Creates a new `Source` given both an `&str` and a path.
    /// Does not check that the contents match the file on disk.
    pub fn new(source: &str, path: &Path) -> Rc<Source> {
        Rc::new(Source {
            contents: source.to_string(),
            path: path.to_owned(),
        })
    }

    /// Build a `Source` by reading a file.
    pub fn path(path: &Path) -> std::io::Result<Rc<Source>> {
        let mut source = String::new();
        let mut file = File::open(path)?;
        file.read_to_string(&mut source)?;

        Ok(Source::new(&source, path))
    }

    /// Build a `Source` containing just a string.
    pub fn source(source: &str) -> Rc<Source> {
        Source::new(source, &PathBuf::from("./source"))
    }
}
