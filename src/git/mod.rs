pub mod batch;
pub mod repository;
pub mod status;

#[allow(unused_imports)]
pub use repository::{
    exec_git, exec_git_stdin, exec_git_unchecked, find_repository, find_repository_in_path,
    Repository,
};
pub use status::WorkingTreeState;
