// fn main not required
mod create_member;
mod helpers;
mod show_member;
