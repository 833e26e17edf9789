//! Content access and the command pipeline
//!
//! - `ContentEntry`, `ContentReader`: what is indexed and where it comes from
//! - `InvocationContext`: per-call schema, name converter, table resolver
//!   and path splitter
//! - `Command` / `Interceptor` / `InterceptorChain`: the execution pipeline
//! - `interceptors`: the built-in pipeline stages

mod command;
mod context;
mod entry;
mod interceptor;
pub mod interceptors;
mod reader;

pub use command::{
    Command, CommandOutput, ExecuteSelectorCommand, GetChildEntriesCommand,
    GetContentEntryCommand, GetUnfiledEntriesCommand, IndexModification, ModifyIndexCommand,
    ProcessQueryCommand,
};
pub use context::{ExactTableResolver, InvocationContext, SchemaTableResolver, TableResolver};
pub use entry::ContentEntry;
pub use interceptor::{Interceptor, InterceptorChain, Next};
pub use reader::{ContentReader, InMemoryContentReader};
