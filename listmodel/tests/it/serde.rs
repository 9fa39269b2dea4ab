use imbl::vector;
use listmodel::ItemsChanged;

macro_rules! test {
    ($test_name:ident: $change:expr => $json:expr) => {
        #[test]
        fn $test_name() -> Result<(), Box<dyn std::error::Error>> {
            let change: ItemsChanged<char> = $change;
            let json = serde_json::to_string(&change)?;

            assert_eq!(json, $json);

            Ok(())
        }
    };
}

test!(insert: ItemsChanged::new(0, 0, vector!['a', 'b']) => r#"{"position":0,"removed":0,"added":["a","b"]}"#);
test!(remove: ItemsChanged::new(42, 3, vector![]) => r#"{"position":42,"removed":3,"added":[]}"#);
test!(replace: ItemsChanged::new(1, 1, vector!['c']) => r#"{"position":1,"removed":1,"added":["c"]}"#);
