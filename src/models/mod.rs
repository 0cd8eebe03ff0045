pub mod comment;
pub mod ticket;
pub mod user;

pub use comment::{Comment, CommentView, NewComment};
pub use ticket::{
    Category, NewTicket, PersonRef, Priority, Ticket, TicketChanges, TicketDetail, TicketFilter,
    TicketStatus, TicketView,
};
pub use user::{NewUser, ProfileChanges, Role, User, UserProfile, UserSummary};
