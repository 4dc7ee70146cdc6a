macro_rules! impl_message {
    ($ty:ident => $($field:ident).+) => {
        impl $crate::message::sealed::Composed for $ty {
            fn message(&self) -> &$crate::Message {
                &self.$($field).+
            }

            fn message_mut(&mut self) -> &mut $crate::Message {
                &mut self.$($field).+
            }
        }

        impl $crate::HttpMessage for $ty {}
    };
}
