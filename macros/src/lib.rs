//! Набор универсальных макросов для приложений Afisha.
use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DataStruct, DeriveInput, Fields, LitInt, Type, parse_macro_input};

/// Точность вывода дробных значений по умолчанию.
const DEFAULT_PRECISION: usize = 4;

/// Макрос `TableRow` автоматически реализует для структуры трейт
/// `TableRow` (см. `commons::traits`): заголовки столбцов по именам полей
/// и текстовое представление ячеек строки.
///
/// Поля `f64` и `Option<f64>` выводятся с фиксированной точностью, которую
/// можно задать атрибутом `#[precision(N)]` (по умолчанию 4 знака).
/// Пустое `Option` выводится пустой ячейкой.
///
/// ## Пример
///
/// ```ignore
/// use commons::traits::TableRow;
/// use macros::TableRow;
///
/// #[derive(TableRow)]
/// struct MonthOrders {
///     month: u32,
///     #[precision(2)]
///     revenue_rub: f64,
/// }
///
/// assert_eq!(MonthOrders::headers(), vec!["month", "revenue_rub"]);
/// ```
#[proc_macro_derive(TableRow, attributes(precision))]
pub fn derive_table_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let struct_name = &input.ident;

    let named = match &input.data {
        Data::Struct(DataStruct {
            fields: Fields::Named(fields),
            ..
        }) => &fields.named,
        _ => panic!("TableRow допустимо использовать только со структурами с именованными полями"),
    };

    let mut headers = Vec::new();
    let mut cells = Vec::new();

    for field in named {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };

        let mut precision = DEFAULT_PRECISION;
        for attr in &field.attrs {
            if attr.path().is_ident("precision") {
                let lit: LitInt = attr.parse_args().expect("precision(N)");
                precision = lit.base10_parse().expect("precision: ожидается целое число");
            }
        }

        let header = syn::LitStr::new(&ident.to_string(), proc_macro2::Span::call_site());
        headers.push(quote! { #header });

        let cell = match classify(&field.ty) {
            FieldKind::Float => quote! { format!("{:.*}", #precision, self.#ident) },
            FieldKind::OptionalFloat => quote! {
                match self.#ident {
                    Some(v) => format!("{:.*}", #precision, v),
                    None => String::new(),
                }
            },
            FieldKind::Optional => quote! {
                self.#ident.as_ref().map(|v| v.to_string()).unwrap_or_default()
            },
            FieldKind::Plain => quote! { self.#ident.to_string() },
        };
        cells.push(cell);
    }

    let expanded = quote! {
        impl TableRow for #struct_name {
            fn headers() -> Vec<&'static str> {
                vec![#(#headers),*]
            }

            fn cells(&self) -> Vec<String> {
                vec![#(#cells),*]
            }
        }
    };

    TokenStream::from(expanded)
}

/// Вид поля с точки зрения форматирования ячейки.
enum FieldKind {
    Float,
    OptionalFloat,
    Optional,
    Plain,
}

/// Определить вид поля по его типу.
fn classify(ty: &Type) -> FieldKind {
    let repr = quote!(#ty).to_string().replace(' ', "");
    match repr.as_str() {
        "f64" | "f32" => FieldKind::Float,
        "Option<f64>" | "Option<f32>" => FieldKind::OptionalFloat,
        s if s.starts_with("Option<") => FieldKind::Optional,
        _ => FieldKind::Plain,
    }
}

/// Derive-макрос для `Enum`: автоматически добавляет реализации
/// [`std::fmt::Display`] и [`std::str::FromStr`], а также константу `ALL`
/// со всеми вариантами в порядке объявления.
///
/// Разбор строки нечувствителен к регистру и пробелам по краям. Для ошибки
/// разбора используется `AfishaError`, который должен быть в области
/// видимости.
///
/// ## Пример
///
/// ```ignore
/// use macros::EnumDisplay;
///
/// #[derive(Debug, Clone, Copy, EnumDisplay)]
/// enum Currency {
///     #[str("rub")]
///     Rub,
///     #[str("kzt")]
///     Kzt,
/// }
///
/// assert_eq!(Currency::Kzt.to_string(), "kzt");
/// assert_eq!(Currency::ALL.len(), 2);
/// ```
#[proc_macro_derive(EnumDisplay, attributes(str))]
pub fn derive_display_fromstr(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let variants = match input.data {
        Data::Enum(e) => e.variants,
        _ => panic!("EnumDisplay допустимо использовать только с enum"),
    };

    let mut to_arms = Vec::new();
    let mut from_arms = Vec::new();
    let mut all = Vec::new();

    for v in variants {
        let ident = v.ident;
        if !matches!(v.fields, Fields::Unit) {
            panic!("Только unit-variants");
        }
        let mut lit = ident.to_string().to_lowercase();
        for attr in v.attrs {
            if attr.path().is_ident("str") {
                let s: syn::LitStr = attr.parse_args().expect("str(\"...\")");
                lit = s.value();
            }
        }
        let lit_str = syn::LitStr::new(&lit, proc_macro2::Span::call_site());
        to_arms.push(quote! { #name::#ident => write!(f, #lit_str), });
        from_arms.push(quote! { #lit_str => Ok(#name::#ident), });
        all.push(quote! { #name::#ident });
    }

    let expanded = quote! {
        impl #name {
            /// Все варианты перечисления в порядке объявления.
            pub const ALL: &'static [#name] = &[#(#all),*];
        }

        impl std::fmt::Display for #name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                match self { #(#to_arms)* }
            }
        }

        impl std::str::FromStr for #name {
            type Err = AfishaError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    #(#from_arms)*
                    _ => Err(AfishaError::value_err(format!(
                        "некорректное значение {}: {}",
                        stringify!(#name), s
                    ))),
                }
            }
        }
    };

    TokenStream::from(expanded)
}
