//! Sample XML documents and matching templates for testing and
//! demonstration.

/// Smallest useful input: one titled root.
pub fn minimal_xml() -> &'static str {
    "<root><title>Hello</title></root>"
}

/// Template for [`minimal_xml`].
pub fn minimal_template() -> &'static str {
    "<h1>{{ data.root.title }}</h1>"
}

/// Invoice with attributes, repeated line items and rich-text notes.
pub fn invoice_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8"?>
<invoice number="2024-001" currency="USD">
    <from>
        <name>Acme Corp</name>
        <address>123 Business St, New York, NY 10001</address>
    </from>
    <to>
        <name>Client Inc</name>
        <address>456 Client Ave, Los Angeles, CA 90001</address>
    </to>
    <line sku="WEB">
        <description>Web Development</description>
        <qty>40</qty>
        <price>150.00</price>
    </line>
    <line sku="DES">
        <description>Design Services</description>
        <qty>20</qty>
        <price>125.00</price>
    </line>
    <line sku="HOST">
        <description>Hosting (Annual)</description>
        <qty>1</qty>
        <price>500.00</price>
    </line>
    <total>9000.00</total>
    <notes><![CDATA[<p>Payment due within <b>30&nbsp;days</b>.</p>]]></notes>
</invoice>
"#
}

/// HTML template for [`invoice_xml`], using every built-in helper.
pub fn invoice_template() -> &'static str {
    r##"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Invoice {{ data.invoice["-number"] }}</title>
    <style>
        body { font-family: sans-serif; margin: 24px; }
        table { width: 100%; border-collapse: collapse; }
        th { background: #e2e8f0; text-align: left; padding: 6px; }
        td { padding: 6px; border-bottom: 1px solid #e2e8f0; }
    </style>
</head>
<body>
    <h1 style="color: #1a365d">Invoice #{{ data.invoice["-number"] }}</h1>
    <p>Issued {{ now() | date(format="%Y-%m-%d") }}</p>

    {% for party in slice(a=data.invoice.from, b=data.invoice.to) %}
    <p><strong>{{ party.name }}</strong><br>{{ party.address }}</p>
    {% endfor %}

    <table>
        <tr><th>#</th><th>Item</th><th>Qty</th><th>Price ({{ data.invoice["-currency"] }})</th></tr>
        {% for line in data.invoice.line %}
        <tr>
            <td>{{ loop.index0 | inc }}</td>
            <td>{{ line.description }}</td>
            <td>{{ line.qty }}</td>
            <td>{{ line.price }}</td>
        </tr>
        {% endfor %}
    </table>

    <p><strong>Total: {{ data.invoice.total }}</strong></p>
    <p>{{ data.invoice.notes | strip }}</p>

    <!-- source data
{{ data.invoice.from | marshal }}
    -->
</body>
</html>
"##
}
