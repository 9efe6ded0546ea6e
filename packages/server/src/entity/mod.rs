pub mod announcement;
pub mod certificate;
pub mod hackathon;
pub mod notification_send_record;
pub mod sponsor;
pub mod submission;
pub mod team;
pub mod team_member;
pub mod user;
