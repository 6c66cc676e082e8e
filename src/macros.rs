#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

#[macro_export]
macro_rules! morph {
    ($name:literal) => {
        $crate::Extraction::Morph($name.to_string())
    };
}

#[macro_export]
macro_rules! feature {
    (
        id: $id:expr,
        category: $category:ident,
        scope: $scope:ident,
        extract: $extract:expr
        $(, values: [ $($value:expr),* $(,)? ])?
        $(, domain: $domain:expr)?
        $(,)?
    ) => {{
        $crate::FeatureDef {
            id: ($id).to_string(),
            category: $crate::FeatureCategory::$category,
            scope: $crate::FeatureScope::$scope,
            extraction: $extract,
            domain: Option::<$crate::ValueDomain>::None
                $(.or(Some($crate::ValueDomain::values(&[ $($value),* ]))))?
                $(.or(Some($domain)))?
                .unwrap_or($crate::ValueDomain::Open),
        }
    }};
}
