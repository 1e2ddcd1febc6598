pub mod navigation;
pub mod notify;
pub mod poller;
pub mod profile_client;
pub mod push;
pub mod role_sync;
pub mod session_store;
pub mod session_sync;

pub use navigation::{InMemoryNavigator, Navigator};
pub use notify::{NoticeLevel, Notifier, RecordingNotifier, TracingNotifier};
pub use poller::RolePoller;
pub use profile_client::{HttpProfileClient, ProfileClient};
pub use push::{ListenerExit, PushConnection, PushConnector, PushListener, ReconnectPolicy, WsConnector};
pub use role_sync::{CoordinatorExit, EventSource, SyncCoordinator, SyncEvent, SyncOutcome};
pub use session_store::{RoleUpdate, SessionStore, SessionStoreHandle};
pub use session_sync::{SessionSync, SessionSyncHandle, SyncDependencies, SyncOptions};
