pub mod app;
mod completion;
mod configure;
mod universal;
