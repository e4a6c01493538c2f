pub mod arrange;
pub mod desktop;
pub mod events;
pub mod fade;
pub mod geometry;
pub mod logging;
pub mod minimize;
pub mod model;
pub mod settings;
pub mod storage;
pub mod updates;
pub mod window;

pub use desktop::Desktop;
pub use events::{DeskEvent, ListChange};
pub use model::{Task, TaskList};
pub use settings::Settings;
pub use storage::{MemoryStore, Store, StoreError, YamlStore};
pub use window::{VirtualHost, WindowHost};
