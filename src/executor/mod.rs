pub mod command;
pub mod composite;
pub mod delete;
pub mod endpoint;
pub mod hierarchy;
pub mod unload;
pub mod unload_all;
pub mod unregister;

pub use command::{
    combine_commands, notify_and_perform, try_notify_and_perform, DataManagementCommand,
    NopCommand,
};
pub use composite::{CompositeCommand, ExpandedCommand};
pub use delete::DeleteCommand;
pub use endpoint::{
    RealEndPointRegistrationDecorator, RealEndPointSetCommand, VirtualEndPointRemoveCommand,
    VirtualEndPointStateDecorator,
};
pub use hierarchy::TransactionHierarchyCommandExecutor;
pub use unload::UnloadCommand;
pub use unload_all::UnloadAllCommand;
pub use unregister::UnregisterEndPointsCommand;
