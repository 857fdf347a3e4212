//! Macros for context builder helpers

/// Generate `new`, `Default` and `with_*` setters for a context struct
///
/// Fields listed in the first block get a `with_<field>` setter; fields in
/// the optional `slots` block are only default-initialized and expose their
/// own accessors. Every context carries an `event_sender`.
#[macro_export]
macro_rules! context_builder {
    ($name:ident { $($field:ident: $ty:ty),* $(,)? } $(slots { $($slot:ident),* $(,)? })?) => {
        paste::paste! {
            impl $name {
                /// Create a new context with default values
                #[must_use]
                pub fn new() -> Self {
                    Self {
                        $($field: Default::default(),)*
                        $($($slot: Default::default(),)*)?
                        event_sender: None,
                    }
                }

                $( #[must_use]
                pub fn [<with_ $field>](mut self, value: $ty) -> Self {
                    self.$field = value;
                    self
                } )*

                /// Set the event sender for progress reporting
                #[must_use]
                pub fn with_event_sender(mut self, sender: cpkg_events::EventSender) -> Self {
                    self.event_sender = Some(sender);
                    self
                }
            }

            impl Default for $name {
                fn default() -> Self {
                    Self::new()
                }
            }
        }
    };
}
