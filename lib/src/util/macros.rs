#[doc(hidden)]
#[macro_export]
macro_rules! dict {
    ($($key:expr => $value:expr),* $(,)?) => ({
        #[allow(unused_mut)]
        let mut dict: $crate::value::Dict = $crate::value::Dict::new();
        $(dict.insert($key.into(), $crate::value::Value::from($value));)*
        dict
    });
}

#[doc(hidden)]
#[macro_export]
macro_rules! time {
    ($($token:tt)*) => ({
        let start = std::time::Instant::now();
        let value = { $($token)* };
        $crate::tracing::debug!("{} {}:{} took {}ms",
            stringify!($($token)*), file!(), line!(), start.elapsed().as_millis());

        value
    });
}

pub use {dict, time};
