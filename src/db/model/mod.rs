pub mod canned_response;
pub mod category;
pub mod message;
pub mod panel;
pub mod reaction;
pub mod ticket;
pub mod user;

pub use canned_response::Entity as CannedResponse;
pub use category::Entity as Category;
pub use message::Entity as Message;
pub use panel::Entity as Panel;
pub use reaction::Entity as Reaction;
pub use ticket::Entity as Ticket;
pub use user::Entity as User;
