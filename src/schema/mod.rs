pub mod goals;
pub mod project;
pub mod tasks;

pub use self::goals::*;
pub use self::project::*;
pub use self::tasks::*;
