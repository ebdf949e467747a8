use quarrel::ValueError;

/// The command line parsed, but doesn't describe something the archiver can
/// do
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("no command was chosen")]
    NoCommand,

    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    #[error("{0} is required")]
    Missing(&'static str),

    #[error(transparent)]
    Value(#[from] ValueError),
}
