pub mod category;
pub mod doctor;
pub mod recent_doctor;
pub mod remote;
pub mod user;

pub use category::Category;
pub use doctor::{Doctor, DoctorSummary, Qualifications};
pub use recent_doctor::RecentDoctor;
pub use remote::{Account, Document, DocumentList, Session};
pub use user::{NewProfile, RegisterData, User, UserProfile, UserRole};
