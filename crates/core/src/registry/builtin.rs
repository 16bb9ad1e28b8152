//! Registrations for scalar types

use super::Reflect;
use crate::lifecycle::Lifecycle;

macro_rules! impl_reflect_scalar {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl Reflect for $ty {
                const TYPE_NAME: &'static str = $name;

                fn lifecycle() -> Lifecycle {
                    Lifecycle::builder::<Self>()
                        .with_default()
                        .with_copy()
                        .with_eq()
                        .build()
                }
            }
        )*
    };
}

impl_reflect_scalar! {
    () => "()",
    bool => "bool",
    char => "char",
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    isize => "isize",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
    usize => "usize",
    f32 => "f32",
    f64 => "f64",
    String => "String",
}

#[cfg(test)]
mod tests {
    use crate::registry::{find_type, type_of};

    #[test]
    fn test_scalars_register_by_rust_name() {
        assert_eq!(type_of::<i32>().name(), "i32");
        assert_eq!(type_of::<String>().name(), "String");
        assert_eq!(type_of::<()>().size(), 0);
        assert_eq!(find_type("f32"), Some(type_of::<f32>()));
    }

    #[test]
    fn test_scalars_have_full_lifecycle() {
        let ty = type_of::<u16>();
        let lifecycle = ty.lifecycle();
        assert!(lifecycle.has_default());
        assert!(lifecycle.has_copy());
        assert!(lifecycle.has_eq());
        assert!(ty.properties().is_empty());
        assert!(ty.parent().is_none());
    }
}
