/// Build a [`Document`](crate::Document) from `key => value` pairs.
///
/// Keys go through [`normalize_key`](crate::normalize_key), so `":name"` and
/// `"name"` produce the same field. Anything implementing `ToString` works as
/// a key, which lets an `ObjectId` key an id-to-attributes mapping.
///
/// ```
/// use docmap_core::{doc, Value};
///
/// let attrs = doc! { "first_name" => "John", ":age" => 27 };
/// assert_eq!(attrs.get("age"), Some(&Value::Int(27)));
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::Document::new()
    };
    ( $( $key:expr => $value:expr ),+ $(,)? ) => {{
        let mut document = $crate::Document::new();
        $(
            document.insert(
                $crate::normalize_key(&($key).to_string()).to_owned(),
                $crate::Value::from($value),
            );
        )+
        document
    }};
}
