//! # elif-di-derive
//!
//! Code generation for elif-di.
//!
//! `#[injectable]` turns a struct into something a scope can build: it emits a
//! `<Name>Factory` implementing `elif_di::Factory<Name>` and, when the struct
//! has `Injected<T>` members, a `<Name>MemberInjector` implementing
//! `elif_di::MemberInjector<Name>`. Register both in the application's
//! registries.
//!
//! ```ignore
//! #[injectable(scope = "ScreenScope", singleton)]
//! pub struct Presenter {
//!     repository: Arc<Repository>,
//!     clock: Lazy<dyn Clock>,
//!     #[inject(named = "api")]
//!     client: ScopedProvider<HttpClient>,
//!     tracker: Injected<Tracker>,
//! }
//! ```

use proc_macro::TokenStream;

mod injectable;

/// Generate a factory, and a member injector when needed, for a struct
#[proc_macro_attribute]
pub fn injectable(args: TokenStream, input: TokenStream) -> TokenStream {
    injectable::injectable_impl(args, input)
}
