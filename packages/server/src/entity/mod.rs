pub mod aggregation;
pub mod apikey;
pub mod comment;
pub mod object;
pub mod object_group;
pub mod object_group_member;
pub mod object_group_right;
pub mod object_stats;
pub mod raw_value;
pub mod tag;
pub mod token;
pub mod unit;
pub mod user;
pub mod user_group;
pub mod user_group_mapping;
pub mod value_type;
