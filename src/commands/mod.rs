mod prerender;

pub use prerender::run_prerender;
