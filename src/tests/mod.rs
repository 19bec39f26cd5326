mod stubs;
mod web;
