pub mod approval;
pub mod attendance;
pub mod bonus;
pub mod contribution;
pub mod employee;
pub mod increment;
pub mod kpi;
pub mod leave;
pub mod meeting;
pub mod promotion;
pub mod report;
pub mod role;
pub mod salary;
pub mod task;
pub mod training;
pub mod user;
